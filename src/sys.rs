
// Thin wrapper over libc calls that follow the "negative result means errno"
// convention.
macro_rules! syscall {
    ($fn:ident ( $($arg:expr),* $(,)? )) => {{
        let result = unsafe { libc::$fn($($arg),*) };
        if result < 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(result)
        }
    }};
}
