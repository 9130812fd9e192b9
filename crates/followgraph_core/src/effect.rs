#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a search for a `username@domain` handle, superseding any running one.
    StartSearch { handle: String },
}
