pub mod conservation;
pub mod databank;
pub mod fasta;
pub mod hit;
pub mod jackhmmer;
pub mod matrix;
pub mod msa;
pub mod protein;
pub mod report;
pub mod residue;
pub mod seq;
pub mod stockholm;
pub mod workflow;
