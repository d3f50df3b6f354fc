pub mod homedir;
