mod howl_desc;
mod world_desc;

pub use howl_desc::{HowlDesc, Sprite};
pub use world_desc::PetalHowlWorldDesc;
