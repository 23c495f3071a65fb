//! Internal machinery, not part of the public API.

mod dispose_bag;

pub(crate) use dispose_bag::DisposeBag;
