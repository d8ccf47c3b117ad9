use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not read credential")]
    Token,
    #[display("music source failed")]
    Source,
    #[display("could not write output")]
    Output,
    #[display("could not read or write saved catalog {}", _0.display())]
    Catalog(#[error(not(source))] PathBuf),
}
