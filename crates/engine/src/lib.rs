pub use commands::{
    CreateShareCmd, CreateSplitExpenseCmd, ReminderChange, SharePatch, SplitExpenseUpdate,
};
pub use error::{EngineError, ErrorKind};
pub use group_members::GroupRole;
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder, ShareDetail};
pub use shares::{ReminderFrequency, Share, ShareState};
pub use split_expenses::SplitExpense;
pub use split_policy::{Portion, SplitParams, SplitStrategy};

mod commands;
mod error;
mod group_members;
pub mod guard;
mod money;
mod ops;
pub mod shares;
mod split_expenses;
pub mod split_policy;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
