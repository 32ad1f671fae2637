mod captured_responses;
