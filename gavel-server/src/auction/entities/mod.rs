pub mod auction;
pub mod bid;
pub mod notification;

pub use {
    auction::*,
    bid::*,
    notification::*,
};
