pub mod cnpj;
pub mod error;

#[cfg(test)]
pub mod testing;
