pub mod diagonalize;
