//! Unit and behavioural tests for the nozzle client.

mod support;
