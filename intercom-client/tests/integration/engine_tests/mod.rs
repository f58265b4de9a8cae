mod test_connect;
mod test_signaling_edges;
