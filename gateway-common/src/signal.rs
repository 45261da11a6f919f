/// Cooperative shutdown signal, broadcast to every long-running loop in the
/// pipeline (worker pool, health evaluator).
///
/// `Shutdown` requests an orderly stop (drain, then cancel on timeout);
/// `Finalised` is sent once teardown has actually completed, so a loop that
/// wakes up between the two can tell the difference between "stop starting"
/// and "stop already happened".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
    Finalised,
}
