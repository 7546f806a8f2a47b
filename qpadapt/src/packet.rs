#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Idr,
    Inter,
}

#[derive(Debug)]
pub struct Packet {
    pub data: Vec<u8>,
    pub frame_type: FrameType,
    pub frame_number: u64,
    dropped: bool,
}

impl Packet {
    /// Result handed back for a dropped frame.
    pub fn dropped(frame_number: u64) -> Self {
        Self {
            data: Vec::new(),
            frame_type: FrameType::Inter,
            frame_number,
            dropped: true,
        }
    }

    pub(crate) fn encoded(data: Vec<u8>, frame_type: FrameType, frame_number: u64) -> Self {
        Self {
            data,
            frame_type,
            frame_number,
            dropped: false,
        }
    }

    /// An encoder may legitimately return zero bytes; only a failed encode
    /// counts as dropped.
    pub fn is_dropped(&self) -> bool {
        self.dropped
    }

    pub fn is_keyframe(&self) -> bool {
        self.frame_type == FrameType::Idr
    }
}
