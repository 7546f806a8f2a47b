use std::ptr;
use std::time::Instant;

use qpadapt::{Baselines, ControllerConfig, Deployment, QpController, ResolutionTier};

pub const QPADAPT_DEPLOYMENT_DESKTOP: u32 = 0;
pub const QPADAPT_DEPLOYMENT_LIVE_STREAM: u32 = 1;

pub const QPADAPT_TIER_AUTO: i32 = -1;
pub const QPADAPT_TIER_SUB_1080: i32 = 0;
pub const QPADAPT_TIER_HD_1080: i32 = 1;

pub struct QpadaptController {
    inner: QpController,
}

#[repr(C)]
pub struct QpadaptConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub deployment: u32,
    pub tier: i32,
    /// All three zero selects the tier defaults.
    pub baseline_low: i32,
    pub baseline_medium: i32,
    pub baseline_high: i32,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QpadaptBaselines {
    pub low: i32,
    pub medium: i32,
    pub high: i32,
}

fn controller_config(cfg: &QpadaptConfig) -> Option<ControllerConfig> {
    let deployment = match cfg.deployment {
        QPADAPT_DEPLOYMENT_DESKTOP => Deployment::Desktop,
        QPADAPT_DEPLOYMENT_LIVE_STREAM => Deployment::LiveStream,
        _ => return None,
    };
    let tier = match cfg.tier {
        QPADAPT_TIER_AUTO => None,
        QPADAPT_TIER_SUB_1080 => Some(ResolutionTier::Sub1080),
        QPADAPT_TIER_HD_1080 => Some(ResolutionTier::Hd1080),
        _ => return None,
    };

    Some(ControllerConfig {
        width: cfg.width,
        height: cfg.height,
        fps: cfg.fps,
        tier,
        deployment,
        baselines: Some(Baselines {
            low: cfg.baseline_low,
            medium: cfg.baseline_medium,
            high: cfg.baseline_high,
        }),
        ..Default::default()
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn qpadapt_controller_new(
    cfg: *const QpadaptConfig,
) -> *mut QpadaptController {
    if cfg.is_null() {
        return ptr::null_mut();
    }

    let cfg = unsafe { &*cfg };
    let Some(config) = controller_config(cfg) else {
        return ptr::null_mut();
    };

    match QpController::new(&config, Instant::now()) {
        Ok(inner) => Box::into_raw(Box::new(QpadaptController { inner })),
        Err(_) => ptr::null_mut(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn qpadapt_controller_free(ctrl: *mut QpadaptController) {
    if !ctrl.is_null() {
        drop(unsafe { Box::from_raw(ctrl) });
    }
}

/// Repaints the ROI map for the next picture. `*out_map` stays valid until
/// the next call on this controller.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qpadapt_controller_prepare(
    ctrl: *mut QpadaptController,
    bitrate: u32,
    out_map: *mut *const i8,
    out_len: *mut usize,
) -> i32 {
    if ctrl.is_null() || out_map.is_null() || out_len.is_null() {
        return -1;
    }

    let ctrl = unsafe { &mut *ctrl };
    let map = ctrl.inner.prepare_frame(bitrate).as_slice();
    unsafe {
        *out_map = map.as_ptr();
        *out_len = map.len();
    }
    0
}

/// Returns 1 when this picture closed a sampling window, 0 otherwise.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qpadapt_controller_frame_encoded(
    ctrl: *mut QpadaptController,
    bitrate: u32,
    encoded_bytes: u64,
) -> i32 {
    if ctrl.is_null() {
        return -1;
    }

    let ctrl = unsafe { &mut *ctrl };
    match ctrl
        .inner
        .frame_encoded(bitrate, encoded_bytes, Instant::now())
    {
        Some(_) => 1,
        None => 0,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn qpadapt_controller_set_paused(ctrl: *mut QpadaptController, paused: i32) {
    if ctrl.is_null() {
        return;
    }

    let ctrl = unsafe { &mut *ctrl };
    ctrl.inner.set_paused(paused != 0, Instant::now());
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn qpadapt_controller_is_armed(ctrl: *const QpadaptController) -> i32 {
    if ctrl.is_null() {
        return -1;
    }

    let ctrl = unsafe { &*ctrl };
    i32::from(ctrl.inner.is_armed())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn qpadapt_controller_baselines(
    ctrl: *const QpadaptController,
    out: *mut QpadaptBaselines,
) -> i32 {
    if ctrl.is_null() || out.is_null() {
        return -1;
    }

    let ctrl = unsafe { &*ctrl };
    let b = ctrl.inner.baselines();
    unsafe {
        *out = QpadaptBaselines {
            low: b.low,
            medium: b.medium,
            high: b.high,
        };
    }
    0
}
