mod test_local_candidates;
