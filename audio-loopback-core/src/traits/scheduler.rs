use std::time::Duration;

/// External source of the periodic tick.
///
/// The controller arms it once buffer sizing is known and cancels it before
/// tearing a session down. Implementations must deliver ticks serially on
/// the thread that owns the controller.
pub trait TickScheduler {
    fn schedule(&mut self, interval: Duration);

    fn cancel(&mut self);
}
