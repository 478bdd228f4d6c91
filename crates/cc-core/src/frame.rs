use crate::face::FaceDetection;

/// Buffer de pixels réutilisable.
///
/// Stocke les pixels en RGBA row-major, 4 bytes par pixel.
///
/// # Example
/// ```
/// use cc_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 400);
/// assert!(fb.is_ready());
/// ```
#[derive(Clone, Debug, Default)]
pub struct FrameBuffer {
    /// Pixels RGBA, row-major, 4 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Crée un buffer pré-alloué aux dimensions données.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    /// Buffer filled with one RGBA color.
    ///
    /// # Example
    /// ```
    /// use cc_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::filled(2, 2, [10, 20, 30, 255]);
    /// assert_eq!(fb.pixel(1, 1), (10, 20, 30, 255));
    /// ```
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Number of pixels described by the dimensions.
    #[inline]
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// `true` once the buffer holds a full decoded frame.
    ///
    /// A zero-sized frame or a buffer shorter than `width × height × 4`
    /// means the source has not delivered pixel data yet.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.pixel_count() > 0 && self.data.len() >= self.pixel_count() * 4
    }

    /// Accès au pixel (x, y) → (r, g, b, a).
    ///
    /// Out-of-range coordinates read as transparent black.
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8, u8) {
        if x >= self.width || y >= self.height {
            return (0, 0, 0, 0);
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        match self.data.get(idx..idx + 4) {
            Some(px) => (px[0], px[1], px[2], px[3]),
            None => (0, 0, 0, 0),
        }
    }
}

/// Une frame d'analyse audio : spectre en octets + niveau moyen.
///
/// Écrit par le thread audio, lu par le thread UI via triple buffer.
/// `seq` augmente à chaque nouvelle analyse, ce qui permet au lecteur
/// de ne traiter chaque frame qu'une fois.
///
/// # Example
/// ```
/// use cc_core::frame::AudioFrame;
/// let f = AudioFrame::default();
/// assert_eq!(f.seq, 0);
/// assert!(f.bins.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct AudioFrame {
    /// Frequency bins on the 0–255 byte scale.
    pub bins: Vec<u8>,
    /// Mean of `bins`.
    pub level: f32,
    /// Monotonic analysis counter (0 = nothing analysed yet).
    pub seq: u64,
}

/// Snapshot of everything measured during one tick.
///
/// Recomputed every tick and never persisted.
#[derive(Clone, Debug, Default)]
pub struct FrameMeasurement {
    /// First detected face, if any.
    pub face: Option<FaceDetection>,
    /// Number of faces in the last detection result.
    pub face_count: usize,
    /// Instantaneous average loudness (byte spectrum scale).
    pub loudness: Option<f32>,
    /// Average frame luma.
    pub brightness: Option<f32>,
}
