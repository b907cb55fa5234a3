// Submodules for separation of concerns
pub mod builders;
mod cursor;
mod eval;
mod parse;
mod types;
mod update;

pub use cursor::{Cursor, CursorIter};
pub use eval::{compare_docs, compare_values, eval_filter, get_path, project, resolve_path, total_cmp, values_equal};
pub use parse::{parse_filter_json, parse_update_json};
pub use types::{
    CmpOp, DeleteReport, Filter, FindOptions, Order, Projection, SortSpec, UpdateDoc, UpdateOp, UpdateReport,
};
pub use update::apply_update;
pub(crate) use update::set_path;
