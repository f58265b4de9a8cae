mod test_register_acknowledges_room;
