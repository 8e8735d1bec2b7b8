/// One fixed-size slice of mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFrame {
    pub seq: u64,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl CaptureFrame {
    /// Encode as a standalone WAV chunk for transmission
    pub fn to_wav(&self) -> Result<Vec<u8>, vibeflow_wav::WavError> {
        vibeflow_wav::encode(&self.samples, self.sample_rate)
    }
}

/// Re-chunks arbitrary callback sizes into fixed-size frames.
///
/// Sequence numbers start at 0 and increase by one per emitted frame.
#[derive(Debug)]
pub struct Framer {
    frame_size: usize,
    sample_rate: u32,
    pending: Vec<f32>,
    next_seq: u64,
}

impl Framer {
    pub fn new(frame_size: usize, sample_rate: u32) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            sample_rate,
            pending: Vec::with_capacity(frame_size),
            next_seq: 0,
        }
    }

    /// Append samples, returning every frame completed by them
    pub fn push(&mut self, samples: &[f32]) -> Vec<CaptureFrame> {
        let mut out = Vec::new();
        let mut rest = samples;

        while !rest.is_empty() {
            let take = (self.frame_size - self.pending.len()).min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.pending.len() == self.frame_size {
                let samples =
                    std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_size));
                out.push(CaptureFrame {
                    seq: self.next_seq,
                    samples,
                    sample_rate: self.sample_rate,
                });
                self.next_seq += 1;
            }
        }
        out
    }

    /// Samples waiting for a full frame
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn frames_emitted(&self) -> u64 {
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uneven_callbacks() {
        let mut framer = Framer::new(4, 8000);
        let input: Vec<f32> = (0..11).map(|i| i as f32).collect();

        let mut frames = framer.push(&input[..3]);
        assert!(frames.is_empty());
        frames.extend(framer.push(&input[3..10]));
        frames.extend(framer.push(&input[10..]));

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].samples, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(frames[1].samples, vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(framer.pending(), 3);
    }

    #[test]
    fn test_sequence_is_contiguous() {
        let mut framer = Framer::new(4096, 44100);
        let mut seqs = Vec::new();
        for _ in 0..40 {
            for frame in framer.push(&[0.0; 1024]) {
                assert_eq!(frame.samples.len(), 4096);
                seqs.push(frame.seq);
            }
        }
        assert_eq!(seqs, (0..10).collect::<Vec<_>>());
        assert_eq!(framer.frames_emitted(), 10);
    }

    #[test]
    fn test_frame_wav_size() {
        let frame = CaptureFrame {
            seq: 0,
            samples: vec![0.0; 4096],
            sample_rate: 44100,
        };
        assert_eq!(frame.to_wav().unwrap().len(), 44 + 8192);
    }
}
