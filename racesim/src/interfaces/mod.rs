pub mod lap_interface;
