pub mod check_aln;
pub mod check_constraints;
pub mod first_seq;
pub mod run;
