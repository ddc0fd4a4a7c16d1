use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::response::CommandResult;

/// Something that can execute a console command and report the outcome.
///
/// [`crate::RconClient`] is the production implementation; the dispatcher
/// and skill routines are generic over this trait so they can be driven by
/// scripted senders in tests.
pub trait CommandSender: Send + Sync {
    fn send_command(
        &self,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = CommandResult> + Send;
}

impl<T: CommandSender> CommandSender for Arc<T> {
    fn send_command(
        &self,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = CommandResult> + Send {
        (**self).send_command(command, timeout)
    }
}
