pub(crate) mod go;
pub(crate) mod gopath;
