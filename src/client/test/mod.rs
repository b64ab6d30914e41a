
mod redirect;
