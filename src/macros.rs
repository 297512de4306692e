/// Logs the error value of a `Result`, if any, without consuming it.
macro_rules! log_if_err {
    ($result:expr, $($arg:tt)*) => {
        if let Err(ref e) = $result {
            error!("{}: {}", format_args!($($arg)*), e);
        }
    };
}
