mod footer;
mod form;
mod input;
mod key_result;
mod picker;

pub use footer::draw_footer;
pub use form::{Form, FormEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use picker::{Picker, PickerEvent};
