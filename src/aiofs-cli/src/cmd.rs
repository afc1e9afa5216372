use std::sync::Arc;

use aiofs::Executor;

pub mod cat;
pub mod limits;
pub mod serve;
pub mod stat;

/// Represents a command in the aiofs application.
pub trait Command {
    /// Consumes a command object and executes the handler actions
    /// associated with it on the given executor.
    ///
    /// On failure, an error will be reported.
    fn handle(self, ex: Arc<Executor>) -> eyre::Result<()>;
}
