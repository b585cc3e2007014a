//! Email parsing: mbox splitting, header model, dates, charsets, encoded
//! words and MIME body decoding.

pub mod charset;
pub mod date;
pub mod encoded_word;
pub mod header;
pub mod mbox;
pub mod mime;
