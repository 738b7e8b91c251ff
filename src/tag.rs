//! Field numbers of `descriptor.proto`, used to build source code info paths.

pub(crate) mod file {
    pub(crate) const DEPENDENCY: i32 = 3;
    pub(crate) const MESSAGE_TYPE: i32 = 4;
    pub(crate) const ENUM_TYPE: i32 = 5;
    pub(crate) const SERVICE: i32 = 6;
    pub(crate) const SYNTAX: i32 = 12;
}

pub(crate) mod message {
    pub(crate) const FIELD: i32 = 2;
    pub(crate) const NESTED_TYPE: i32 = 3;
    pub(crate) const ENUM_TYPE: i32 = 4;
}

pub(crate) mod enum_ {
    pub(crate) const VALUE: i32 = 2;
}

pub(crate) mod service {
    pub(crate) const METHOD: i32 = 2;
}
