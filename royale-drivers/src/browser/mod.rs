pub mod behavioral;
pub mod driver;
pub mod fingerprint;
pub mod page;
pub mod stealth;

pub use driver::RoyaleDriver;
pub use page::RoyalePage;
pub use stealth::StealthProfile;
