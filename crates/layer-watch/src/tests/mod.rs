mod waiter_test;
