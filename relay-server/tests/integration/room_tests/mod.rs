mod test_subscribe_wait_ceiling;
