// Kernel test module
#[cfg(test)]
pub(crate) mod support;
#[cfg(test)]
mod descriptor_tests;
#[cfg(test)]
mod diagnostics_tests;
