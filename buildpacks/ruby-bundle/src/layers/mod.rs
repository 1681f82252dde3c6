pub(crate) mod gems;
