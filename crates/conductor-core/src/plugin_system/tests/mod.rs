// Plugin system test module
#[cfg(test)]
pub(crate) mod fakes;
