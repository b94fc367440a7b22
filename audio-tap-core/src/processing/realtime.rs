//! Time-critical scheduling for clocked workers.

#[cfg(target_os = "windows")]
use windows::Win32::System::Threading::{
    AvRevertMmThreadCharacteristics, AvSetMmThreadCharacteristicsW, AvSetMmThreadPriority, AVRT_PRIORITY_HIGH,
};

/// Keeps the calling thread registered with the platform's real-time
/// scheduler until dropped.
#[cfg(target_os = "windows")]
pub struct RealtimeGuard(windows::Win32::Foundation::HANDLE);

#[cfg(target_os = "windows")]
impl Drop for RealtimeGuard {
    fn drop(&mut self) {
        let _ = unsafe { AvRevertMmThreadCharacteristics(self.0) };
    }
}

/// Register the calling thread with MMCSS as "Pro Audio" at high priority.
#[cfg(target_os = "windows")]
pub fn enable_time_critical_priority() -> Option<RealtimeGuard> {
    let mut task_index = 0u32;
    let task = windows::core::HSTRING::from("Pro Audio");
    let handle = match unsafe { AvSetMmThreadCharacteristicsW(&task, &mut task_index) } {
        Ok(handle) => handle,
        Err(e) => {
            log::warn!("MMCSS registration failed: {}", e);
            return None;
        }
    };
    let _ = unsafe { AvSetMmThreadPriority(handle, AVRT_PRIORITY_HIGH) };
    Some(RealtimeGuard(handle))
}

#[cfg(not(target_os = "windows"))]
pub struct RealtimeGuard;

/// No real-time scheduler integration on this platform; the worker keeps its
/// default priority.
#[cfg(not(target_os = "windows"))]
pub fn enable_time_critical_priority() -> Option<RealtimeGuard> {
    log::debug!("time-critical priority not available on this platform");
    None
}
