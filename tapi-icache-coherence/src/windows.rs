use windows_sys::Win32::System::Diagnostics::Debug::FlushInstructionCache;
use windows_sys::Win32::System::Threading::GetCurrentProcess;

pub(crate) unsafe fn flush(addr: *const u8, len: usize) {
    unsafe {
        FlushInstructionCache(GetCurrentProcess(), addr.cast(), len);
    }
}
