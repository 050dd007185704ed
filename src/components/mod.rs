pub mod case_graph;
