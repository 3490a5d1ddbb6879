mod convert;
mod format;

pub use convert::lamports_to_sol;
pub use convert::to_ui_amount;
pub use format::format_change;
pub use format::format_pubkey;
