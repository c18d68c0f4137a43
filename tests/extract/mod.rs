//! End-to-end extraction tests over synthesized PE files.

mod adversarial;
mod features;
mod sniffing;
