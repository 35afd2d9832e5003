mod grant;
mod privilege;
mod requirement;
mod source;
mod video;
mod view;

pub use grant::*;
pub use privilege::*;
pub use requirement::*;
pub use source::*;
pub use video::*;
pub use view::*;
