use std::net::TcpListener;

/// Check whether something already listens on `port`.
///
/// Attempts a transient bind on the loopback interface: bind success means
/// the port is free (the listener is dropped immediately), bind failure means
/// it is taken. The outcome is synchronous: no connection attempts, no
/// polling. Binding loopback instead of `0.0.0.0` also avoids triggering the
/// macOS firewall prompt for the shell itself.
pub(crate) fn is_port_in_use(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_err()
}
