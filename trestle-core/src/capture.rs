use crate::{QueryError, Result, SqlStatement};

/// The output of a mutation's compile phase: the statement the compiler
/// produced, plus the follow-up select built before the mutation runs. Per
/// kind: the predicate re-select for DELETE (the rows are gone afterwards),
/// the primary-key pin for UPDATE (an assignment may invalidate the
/// predicate), the identity select for INSERT.
#[derive(Debug, Clone)]
pub struct CapturedCommand {
    pub statement: SqlStatement,
    pub reselect: Option<SqlStatement>,
}

/// A one-shot slot holding the command captured during the compile phase.
///
/// Each logical call constructs its own slot, so two calls compiling
/// concurrently can never see each other's capture. The slot enforces
/// one-store/one-take: storing over an armed slot or taking from an empty
/// one is an [`QueryError::InvariantViolation`], never a silent overwrite.
#[derive(Debug, Default)]
pub struct MutationCapture {
    slot: Option<CapturedCommand>,
}

impl MutationCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot with the compiled command. Fails if already armed.
    pub fn store(&mut self, command: CapturedCommand) -> Result<()> {
        if self.slot.is_some() {
            return Err(QueryError::InvariantViolation(
                "a mutation was compiled twice without being consumed".into(),
            )
            .into());
        }
        self.slot = Some(command);
        Ok(())
    }

    /// Consume the captured command. Fails if nothing was stored or the
    /// command was already taken.
    pub fn take(&mut self) -> Result<CapturedCommand> {
        self.slot.take().ok_or_else(|| {
            QueryError::InvariantViolation(
                "no compiled mutation to consume, compile must run first".into(),
            )
            .into()
        })
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }
}
