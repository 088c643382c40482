mod fingerprint;
mod scheduler;
