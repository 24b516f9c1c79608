mod network_test;
