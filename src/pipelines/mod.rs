pub mod rnaseq_map;
