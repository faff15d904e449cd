pub mod zika;

#[cfg(test)]
pub mod toy;
