pub mod keypair;
pub mod keypair_list;

pub use keypair::{KeyPair, KeyPairState};
pub use keypair_list::KeyPairList;
