pub mod types;

pub use types::{DailyBar, LegAction, OptionLeg, OptionQuote, OptionType, OptionsChain};
