use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cache::{ResourceCache, SourceId};
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::controller::QpController;
use crate::error::{ConfigError, EncodeError};
use crate::packet::{FrameType, Packet};

/// Per-picture parameters handed to the hardware encoder.
#[derive(Debug, Clone, Copy)]
pub struct PictureParams<'a> {
    pub qp_delta_map: Option<&'a [i8]>,
    pub force_keyframe: bool,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPicture {
    pub data: Vec<u8>,
    pub is_keyframe: bool,
}

/// The vendor encoder session the controller sits on top of.
pub trait HwEncoder {
    type Resource;

    fn register(&mut self, source: SourceId) -> Result<Self::Resource, EncodeError>;

    fn unregister(&mut self, resource: Self::Resource);

    fn set_bitrate(&mut self, bitrate: u32) -> Result<(), EncodeError>;

    fn encode(
        &mut self,
        resource: &mut Self::Resource,
        params: &PictureParams<'_>,
    ) -> Result<EncodedPicture, EncodeError>;
}

/// One encode session: resource cache, bitrate floor and the optional
/// adaptive QP controller. Driven by a single caller, one frame at a time.
pub struct EncodeSession<E: HwEncoder, C: Clock = SystemClock> {
    encoder: E,
    clock: C,
    resources: ResourceCache<E::Resource>,
    controller: Option<QpController>,
    bitrate: u32,
    min_bitrate: u32,
    frame_number: u64,
    dropped_frames: u64,
}

impl<E: HwEncoder> EncodeSession<E, SystemClock> {
    pub fn new(encoder: E, config: &SessionConfig) -> Result<Self, ConfigError> {
        Self::with_clock(encoder, config, SystemClock)
    }
}

impl<E: HwEncoder, C: Clock> EncodeSession<E, C> {
    pub fn with_clock(encoder: E, config: &SessionConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let controller = if config.adaptive_qp {
            Some(QpController::new(&config.controller, clock.now())?)
        } else {
            None
        };

        info!(
            width = config.controller.width,
            height = config.controller.height,
            bitrate = config.initial_bitrate,
            min_bitrate = config.min_bitrate(),
            adaptive_qp = config.adaptive_qp,
            "encode session created"
        );

        Ok(Self {
            encoder,
            clock,
            resources: ResourceCache::new(),
            controller,
            bitrate: config.initial_bitrate,
            min_bitrate: config.min_bitrate(),
            frame_number: 0,
            dropped_frames: 0,
        })
    }

    pub fn controller(&self) -> Option<&QpController> {
        self.controller.as_ref()
    }

    pub fn controller_mut(&mut self) -> Option<&mut QpController> {
        self.controller.as_mut()
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn encoder_mut(&mut self) -> &mut E {
        &mut self.encoder
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }

    pub fn min_bitrate(&self) -> u32 {
        self.min_bitrate
    }

    pub fn registered_sources(&self) -> usize {
        self.resources.len()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Live-stream sessions only; see [`QpController::set_paused`].
    pub fn set_source_paused(&mut self, paused: bool) {
        let now = self.clock.now();
        if let Some(controller) = self.controller.as_mut() {
            controller.set_paused(paused, now);
        }
    }

    /// Encodes one frame. Failures drop the frame: the returned packet is
    /// empty and the session stays usable.
    pub fn encode(
        &mut self,
        source: SourceId,
        requested_bitrate: u32,
        force_keyframe: bool,
    ) -> Packet {
        match self.try_encode(source, requested_bitrate, force_keyframe) {
            Ok(packet) => packet,
            Err(err) => {
                let frame_number = self.frame_number;
                self.frame_number += 1;
                self.dropped_frames += 1;
                warn!(%source, frame_number, error = %err, "frame dropped");
                Packet::dropped(frame_number)
            }
        }
    }

    pub fn try_encode(
        &mut self,
        source: SourceId,
        requested_bitrate: u32,
        force_keyframe: bool,
    ) -> Result<Packet, EncodeError> {
        let bitrate = requested_bitrate.max(self.min_bitrate);
        if bitrate != self.bitrate {
            match self.encoder.set_bitrate(bitrate) {
                Ok(()) => {
                    debug!(from = self.bitrate, to = bitrate, "encoder bitrate reconfigured")
                }
                Err(err) => warn!(bitrate, error = %err, "encoder bitrate reconfigure failed"),
            }
            self.bitrate = bitrate;
        }

        let encoder = &mut self.encoder;
        let resource = self
            .resources
            .get_or_register(source, |id| encoder.register(id))?;

        let qp_delta_map = self
            .controller
            .as_mut()
            .map(|controller| controller.prepare_frame(bitrate).as_slice());

        let params = PictureParams {
            qp_delta_map,
            force_keyframe,
            timestamp: self.frame_number,
        };
        let picture = encoder.encode(resource, &params)?;

        let now = self.clock.now();
        if let Some(controller) = self.controller.as_mut() {
            controller.frame_encoded(bitrate, picture.data.len() as u64, now);
        }

        let frame_number = self.frame_number;
        self.frame_number += 1;
        let frame_type = if picture.is_keyframe {
            FrameType::Idr
        } else {
            FrameType::Inter
        };
        Ok(Packet::encoded(picture.data, frame_type, frame_number))
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}

impl<E: HwEncoder, C: Clock> Drop for EncodeSession<E, C> {
    fn drop(&mut self) {
        let count = self.resources.len();
        for (id, resource) in self.resources.drain() {
            debug!(source = %id, "source buffer unregistered");
            self.encoder.unregister(resource);
        }
        info!(
            released = count,
            frames = self.frame_number,
            dropped = self.dropped_frames,
            "encode session destroyed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ControllerConfig;

    #[derive(Default)]
    struct FakeEncoder {
        registered: Vec<SourceId>,
        unregistered: Rc<RefCell<Vec<u32>>>,
        bitrates: Vec<u32>,
        maps: Vec<Option<Vec<i8>>>,
        fail_register: bool,
        fail_encode: bool,
        frame_bytes: usize,
    }

    impl HwEncoder for FakeEncoder {
        type Resource = u32;

        fn register(&mut self, source: SourceId) -> Result<u32, EncodeError> {
            if self.fail_register {
                return Err(EncodeError::Registration {
                    id: source,
                    reason: "busy".into(),
                });
            }
            self.registered.push(source);
            Ok(source.0)
        }

        fn unregister(&mut self, resource: u32) {
            self.unregistered.borrow_mut().push(resource);
        }

        fn set_bitrate(&mut self, bitrate: u32) -> Result<(), EncodeError> {
            self.bitrates.push(bitrate);
            Ok(())
        }

        fn encode(
            &mut self,
            _resource: &mut u32,
            params: &PictureParams<'_>,
        ) -> Result<EncodedPicture, EncodeError> {
            if self.fail_encode {
                return Err(EncodeError::Encode("device lost".into()));
            }
            self.maps.push(params.qp_delta_map.map(<[i8]>::to_vec));
            Ok(EncodedPicture {
                data: vec![0; self.frame_bytes],
                is_keyframe: params.force_keyframe,
            })
        }
    }

    fn session(config: SessionConfig) -> EncodeSession<FakeEncoder, ManualClock> {
        let encoder = FakeEncoder {
            frame_bytes: 1000,
            ..Default::default()
        };
        EncodeSession::with_clock(encoder, &config, ManualClock::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SessionConfig {
            controller: ControllerConfig::new(0, 0, 30),
            ..Default::default()
        };
        assert!(EncodeSession::new(FakeEncoder::default(), &config).is_err());
    }

    #[test]
    fn registers_each_source_once() {
        let mut s = session(SessionConfig::default());
        for _ in 0..3 {
            s.encode(SourceId(1), 3_000_000, false);
            s.encode(SourceId(2), 3_000_000, false);
        }
        assert_eq!(s.encoder().registered, vec![SourceId(1), SourceId(2)]);
        assert_eq!(s.registered_sources(), 2);
    }

    #[test]
    fn requested_bitrate_is_floored() {
        let mut s = session(SessionConfig::default());
        s.encode(SourceId(1), 100_000, false);
        assert_eq!(s.bitrate(), 1_200_000);
        assert_eq!(s.encoder().bitrates, vec![1_200_000]);

        s.encode(SourceId(1), 100_000, false);
        assert_eq!(s.encoder().bitrates.len(), 1);
    }

    #[test]
    fn attaches_roi_map_when_adaptive() {
        let mut s = session(SessionConfig::default());
        s.encode(SourceId(1), 3_000_000, false);
        let map = s.encoder().maps[0].as_ref().unwrap();
        assert_eq!(map.len(), 120 * 68);
    }

    #[test]
    fn plain_session_sends_no_map() {
        let mut s = session(SessionConfig {
            adaptive_qp: false,
            ..Default::default()
        });
        s.encode(SourceId(1), 3_000_000, false);
        assert!(s.encoder().maps[0].is_none());
        assert!(s.controller().is_none());
    }

    #[test]
    fn registration_failure_drops_frame_and_allows_retry() {
        let mut s = session(SessionConfig::default());
        s.encoder.fail_register = true;
        let packet = s.encode(SourceId(9), 3_000_000, false);
        assert!(packet.is_dropped());
        assert_eq!(s.dropped_frames(), 1);
        assert_eq!(s.registered_sources(), 0);

        s.encoder.fail_register = false;
        let packet = s.encode(SourceId(9), 3_000_000, true);
        assert!(!packet.is_dropped());
        assert!(packet.is_keyframe());
        assert_eq!(packet.frame_number, 1);
    }

    #[test]
    fn encode_failure_skips_controller_feedback() {
        let mut s = session(SessionConfig::default());
        s.encoder.fail_encode = true;
        let err = s.try_encode(SourceId(1), 3_000_000, false).unwrap_err();
        assert_eq!(err, EncodeError::Encode("device lost".into()));
        assert!(s.encode(SourceId(1), 3_000_000, false).is_dropped());
        assert_eq!(s.registered_sources(), 1);
        assert_eq!(s.dropped_frames(), 1);
    }

    #[test]
    fn encoded_size_feeds_controller() {
        let mut s = session(SessionConfig {
            controller: ControllerConfig {
                deployment: crate::preset::Deployment::LiveStream,
                ..Default::default()
            },
            ..Default::default()
        });
        s.clock().advance(Duration::from_secs(121));
        s.encode(SourceId(1), 3_000_000, false);
        assert!(s.controller().unwrap().is_armed());
        for _ in 0..30 {
            s.clock().advance(Duration::from_millis(34));
            s.encode(SourceId(1), 3_000_000, false);
        }
        let stats = s.controller().unwrap().stats();
        assert_eq!(stats.windows_evaluated, 1);
        // every frame is 1000 bytes; the window closed on the 30th frame after arming
        assert_eq!(stats.last_window_bits, Some(30 * 1000 * 8 + 1000 * 8));
    }

    #[test]
    fn drop_unregisters_everything() {
        let unregistered = Rc::new(RefCell::new(Vec::new()));
        let encoder = FakeEncoder {
            unregistered: Rc::clone(&unregistered),
            ..Default::default()
        };
        let clock = ManualClock::default();
        let mut s = EncodeSession::with_clock(encoder, &SessionConfig::default(), &clock).unwrap();
        s.encode(SourceId(3), 3_000_000, false);
        s.encode(SourceId(4), 3_000_000, false);
        s.encode(SourceId(3), 3_000_000, false);
        assert!(unregistered.borrow().is_empty());

        drop(s);
        let mut released = unregistered.borrow().clone();
        released.sort();
        assert_eq!(released, vec![3, 4]);
    }
}
