// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use conquer_once::spin::OnceCell;

/// Delay provider. Embedders without threads register their own busy-wait
/// or timer hook; hosted builds fall back to `std::thread::sleep`.
#[derive(Clone)]
pub struct SpdmTime {
    pub sleep_cb: fn(us: usize),
}

static TIME_INSTANCE: OnceCell<SpdmTime> = OnceCell::uninit();

pub fn register(context: SpdmTime) -> bool {
    TIME_INSTANCE.try_init_once(|| context).is_ok()
}

pub fn sleep(us: usize) {
    if let Ok(time) = TIME_INSTANCE.try_get() {
        (time.sleep_cb)(us);
        return;
    }
    #[cfg(feature = "std")]
    std::thread::sleep(std::time::Duration::from_micros(us as u64));
    #[cfg(not(feature = "std"))]
    let _ = us;
}
