pub(crate) mod npm_modules;
